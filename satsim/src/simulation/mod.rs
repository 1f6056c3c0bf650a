pub mod states;
pub mod params;
pub mod engine;
pub mod forces;
pub mod backend;
pub mod integrator;
pub mod compositor;
pub mod oracle;
pub mod driver;
pub mod scenario;
