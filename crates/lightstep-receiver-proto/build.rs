// Build script for generating Rust code from the collector protobuf definition.
//
// protoc comes from protoc-bin-vendored unless PROTOC is already set, so the
// crate builds on machines without a system protobuf compiler.

use std::path::PathBuf;

fn main() {
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path().expect("vendored protoc not available");
        std::env::set_var("PROTOC", protoc);
    }
    let well_known = protoc_bin_vendored::include_path().expect("vendored protoc includes missing");

    // Server stubs for the receiver, client stubs for integration tests
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &["proto/lightstep/collector/collector.proto"],
            &[PathBuf::from("proto"), well_known],
        )
        .unwrap();

    println!("cargo:rerun-if-changed=proto/");
}
