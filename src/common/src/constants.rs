pub const WORKING_DIR: &str = "/tmp/sfbridge/";
pub const PID_FILE: &str = "/tmp/sfbridge/sfbridged.pid";
pub const STDOUT_FILE: &str = "/tmp/sfbridge/sfbridged.out";
pub const STDERR_FILE: &str = "/tmp/sfbridge/sfbridged.err";
pub const LOG_DIR: &str = "/tmp/sfbridge/logs";
pub const LOG_FILE_PREFIX: &str = "sfbridged.log";

pub const CONFIG_FILE_NAME: &str = "sfbridge.json";
pub const CONFIG_DIR_NAME: &str = "sfbridge";
