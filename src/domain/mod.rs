// Domain layer: DTOs handed to the host platform and the ports the service is built on.

pub mod model;
pub mod ports;
