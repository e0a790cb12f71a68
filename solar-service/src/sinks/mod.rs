pub mod postgres;

pub use postgres::PgInstallationSink;
