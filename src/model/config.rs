use clap::{Parser, command};
use serde::{Deserialize, Serialize};

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file.
     */
    #[arg(short, long)]
    pub config_file: String,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    pub logging: LoggingConfig,
    /**
     * Server configuration for the application.
     */
    pub server: Server,
    /**
     * Database configuration for the application.
     */
    pub database: Database,
    /**
     * Document storage configuration.
     */
    #[serde(default)]
    pub storage: StorageConfig,
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log thread names.
     */
    pub thread_names: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Whether to log the source file.
     */
    pub file: bool,
    /**
     * Path to the log file. Logs go to stdout when not set.
     */
    pub logfile: Option<String>,
    /**
     * Additional directives for logging configuration.
     */
    pub directives: Vec<String>,
}

impl LoggingConfig {
    #[allow(dead_code)]
    pub fn default() -> Self {
        LoggingConfig {
            target: true,
            thread_ids: true,
            thread_names: true,
            line_number: true,
            level: true,
            ansi: true,
            file: true,
            logfile: Some("/tmp/fleet_office.log".to_string()),
            directives: vec![],
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /**
     * Type of the database (e.g., `PostgreSQL`).
     */
    pub db_type: DatabaseType,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseType {
    /**
     * `PostgreSQL` database type.
     */
    #[serde(rename_all = "camelCase")]
    Postgresql {
        connection_string: String,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: u64,
        acquire_slow_threshold: u64,
        idle_timeout: u64,
        max_lifetime: u64,
        #[serde(default)]
        run_migrations: bool,
    },
}

/**
 * Represents the server configuration for the application.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /**
     * Number of worker threads for the server.
     */
    pub workers: usize,
    /**
     * Address the listeners bind to.
     */
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /**
     * HTTP port for the server.
     */
    pub http_port: Option<u16>,
    /**
     * HTTPS configuration for the server.
     */
    pub https_config: Option<HttpsConfig>,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

/**
 * Represents the HTTPS configuration for the server.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpsConfig {
    /**
     * Port for the HTTPS server.
     */
    pub port: u16,
    /**
     * Path to the certificate file.
     */
    pub certificate_file: String,
    /**
     * Path to the private key file.
     */
    pub private_key_file: String,
}

/**
 * Document storage configuration.
 */
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageConfig {
    /**
     * Root directory of all uploaded files.
     */
    pub root_directory: String,
    /**
     * Maximum size in bytes of an uploaded document.
     */
    pub max_document_size: u64,
    /**
     * Maximum size in bytes of an uploaded image.
     */
    pub max_image_size: u64,
    /**
     * Days before expiry a document counts as expiring soon.
     */
    pub expiry_warning_days: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig { root_directory: "uploads".to_string(), max_document_size: 10 * 1024 * 1024, max_image_size: 5 * 1024 * 1024, expiry_warning_days: 30 }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_config_serialization() {
        let config = Config {
            logging: LoggingConfig::default(),
            database: Database {
                db_type: DatabaseType::Postgresql {
                    connection_string: "".to_string(),
                    max_connections: 5,
                    min_connections: 1,
                    acquire_timeout: 30,
                    acquire_slow_threshold: 60,
                    idle_timeout: 300,
                    max_lifetime: 3600,
                    run_migrations: true,
                },
            },
            server: Server { workers: 4, bind_address: "0.0.0.0".to_string(), http_port: Some(8080), https_config: None },
            storage: StorageConfig { root_directory: "/var/lib/fleet/uploads".to_string(), ..StorageConfig::default() },
        };
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.logging.target, deserialized.logging.target);
        assert_eq!(config.logging.thread_ids, deserialized.logging.thread_ids);
        assert_eq!(config.logging.line_number, deserialized.logging.line_number);
        assert_eq!(config.logging.level, deserialized.logging.level);
        assert_eq!(config.logging.ansi, deserialized.logging.ansi);
        assert_eq!(config.logging.file, deserialized.logging.file);
        assert_eq!(config.logging.logfile, deserialized.logging.logfile);
        assert_eq!(config.logging.directives, deserialized.logging.directives);
        assert_eq!(config.server.workers, deserialized.server.workers);
        assert_eq!(config.server.http_port, deserialized.server.http_port);
        assert_eq!(deserialized.server.bind_address, "0.0.0.0");
        assert!(deserialized.server.https_config.is_none());
        assert_eq!(deserialized.storage.root_directory, "/var/lib/fleet/uploads");
        assert_eq!(deserialized.storage.max_document_size, 10 * 1024 * 1024);
        let DatabaseType::Postgresql { run_migrations, max_connections, .. } = deserialized.database.db_type;
        assert!(run_migrations);
        assert_eq!(max_connections, 5);
    }

    #[test]
    fn test_config_defaults() {
        let config_str = r#"
            [logging]
            target = true
            threadIds = false
            threadNames = false
            lineNumber = true
            level = true
            ansi = false
            file = false
            directives = ["fleet_office=debug"]

            [server]
            workers = 2
            httpPort = 8080

            [database.dbType.postgresql]
            connectionString = "postgres://localhost/fleet"
            maxConnections = 10
            minConnections = 1
            acquireTimeout = 1000
            acquireSlowThreshold = 500
            idleTimeout = 60000
            maxLifetime = 600000
        "#;
        let config: Config = toml::from_str(config_str).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert!(config.logging.logfile.is_none());
        assert_eq!(config.storage.root_directory, "uploads");
        assert_eq!(config.storage.max_image_size, 5 * 1024 * 1024);
        assert_eq!(config.storage.expiry_warning_days, 30);
        let DatabaseType::Postgresql { run_migrations, .. } = config.database.db_type;
        assert!(!run_migrations);
    }
}
