pub const DEFAULT_API_VERSION: &str = "v1";

pub const TOOL_DIR: &str = ".stratus";
pub const TOOL_DEFAULT_CONFIG_FILE: &str = "config.yaml";
