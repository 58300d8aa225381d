// Adapters - External system implementations

pub mod frame_index;
pub mod marks_file;
pub mod recording_info;
pub mod toml_config;
pub mod vps_log;

// Re-export adapters
pub use frame_index::{FrameIndex, FrameIndexDecoder, FrameIndexSections};
pub use marks_file::MarksFileAdapter;
pub use recording_info::RecordingInfoAdapter;
pub use toml_config::{ConfigFile, TomlConfigAdapter};
