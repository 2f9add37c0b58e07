pub mod agent;
pub mod caller;
pub mod conf;
pub mod context;
pub mod grpc;
pub mod probe;
pub mod structures;
