//! Grid Traffic Simulation Library
//!
//! A discrete-time traffic simulation on a grid road network with traffic
//! lights, pedestrian crossings and parking. Run it headless through the
//! binary or drive `SimWorld` directly.

pub mod simulation;
