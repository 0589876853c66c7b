//! Build script for distcalc-shared.
//!
//! Compiles the `distcalc.v1` Protocol Buffer package for the gRPC dispatch
//! stream. Generated code lands in `$OUT_DIR` and is pulled in via
//! `tonic::include_proto!` in `src/lib.rs`.
//!
//! Requires the `protoc` compiler to be installed on the system.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("proto");
    let proto_file = proto_root.join("distcalc/v1/dispatch.proto");

    tonic_prost_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(&[proto_file.clone()], &[proto_root.clone()])?;

    println!("cargo:rerun-if-changed={}", proto_file.display());

    Ok(())
}
