pub mod cors;
pub mod errors;
pub mod graphql;
pub mod health;
pub mod mock;
pub mod schema;
pub mod server;
