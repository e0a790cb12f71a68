pub mod installation_queries;
