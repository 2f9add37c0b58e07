use std::env;

const REGEN_ENV: &str = "APPLIANCE_AGENT_REGEN_PROTOS";
const OUT_DIR: &str = "src/grpc";
const CODEC_PATH: &str = "crate::grpc::codec::AgentCodec";

fn main() {
    println!("cargo:rerun-if-changed=protos");
    println!("cargo:rerun-if-env-changed={}", REGEN_ENV);

    // The generated files are checked in, protoc is only needed to refresh them.
    if env::var_os(REGEN_ENV).is_none() {
        return;
    }

    // messages -> src/grpc/virtualappliance.rs
    prost_build::Config::new()
        .out_dir(OUT_DIR)
        .compile_protos(&["protos/virtual_appliance.proto"], &["protos"])
        .unwrap();

    // service stubs -> src/grpc/virtualappliance.ApplianceAgent.rs
    let ping = tonic_build::manual::Method::builder()
        .name("ping")
        .route_name("Ping")
        .input_type("super::PingRequest")
        .output_type("super::PingResponse")
        .codec_path(CODEC_PATH)
        .build();
    let service = tonic_build::manual::Service::builder()
        .name("ApplianceAgent")
        .package("virtualappliance")
        .method(ping)
        .build();
    tonic_build::manual::Builder::new()
        .out_dir(OUT_DIR)
        .compile(&[service]);
}
