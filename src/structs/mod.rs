pub mod configuration;
pub mod get_inputs;
pub mod get_outputs;
pub mod post_inputs;
pub mod region;
pub mod submitted_protocol;
pub mod session;
