pub mod codec;
#[rustfmt::skip]
pub mod virtualappliance {
    include!("virtualappliance.rs");
    include!("virtualappliance.ApplianceAgent.rs");
}

pub use virtualappliance::appliance_agent_client::ApplianceAgentClient;
pub use virtualappliance::appliance_agent_server::{ApplianceAgent, ApplianceAgentServer};
pub use virtualappliance::{PingRequest, PingResponse};

pub const SERVICE_NAME: &str = "virtualappliance.ApplianceAgent";
pub const PING_PATH: &str = "/virtualappliance.ApplianceAgent/Ping";
