pub mod health;
pub mod manifests;

pub use health::health_routes;
pub use manifests::manifest_routes;
