use std::sync::Arc;

use crate::adapters::RecordingInfoAdapter;
use crate::app::{
    inspect_interactor::InspectInteractor, mark_interactor::MarkInteractor,
    verify_interactor::VerifyInteractor,
};
use crate::engine::{AbortFlag, EngineConfig, TracingProgressCallback};
use crate::ports::RecordingInfoPort;

pub trait AppContainer {
    fn mark_interactor(&self) -> Arc<MarkInteractor>;
    fn inspect_interactor(&self) -> Arc<InspectInteractor>;
    fn verify_interactor(&self) -> Arc<VerifyInteractor>;
}

pub struct DefaultAppContainer {
    mark_interactor: Arc<MarkInteractor>,
    inspect_interactor: Arc<InspectInteractor>,
    verify_interactor: Arc<VerifyInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: EngineConfig, abort: AbortFlag) -> Self {
        let info_port = Arc::new(RecordingInfoAdapter::new());

        let mark_interactor = Arc::new(
            MarkInteractor::new(Arc::clone(&info_port) as Arc<dyn RecordingInfoPort>, config, abort)
                .with_callback(Arc::new(TracingProgressCallback)),
        );

        let inspect_interactor = Arc::new(InspectInteractor::new(
            Arc::clone(&info_port) as Arc<dyn RecordingInfoPort>,
        ));

        let verify_interactor = Arc::new(VerifyInteractor::new(
            Arc::clone(&info_port) as Arc<dyn RecordingInfoPort>,
        ));

        Self {
            mark_interactor,
            inspect_interactor,
            verify_interactor,
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn mark_interactor(&self) -> Arc<MarkInteractor> {
        Arc::clone(&self.mark_interactor)
    }

    fn inspect_interactor(&self) -> Arc<InspectInteractor> {
        Arc::clone(&self.inspect_interactor)
    }

    fn verify_interactor(&self) -> Arc<VerifyInteractor> {
        Arc::clone(&self.verify_interactor)
    }
}
