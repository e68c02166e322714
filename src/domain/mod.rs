// Domain layer: models and ports. Concrete collaborators live under core/ and adapters/.

pub mod model;
pub mod ports;
