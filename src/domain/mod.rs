// Domain layer: table model and the configuration port.

pub mod model;
pub mod ports;
