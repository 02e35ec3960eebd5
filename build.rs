use std::env;
use std::error::Error;
use std::path::PathBuf;

use tonic_build::manual::{Builder, Method, Service};

fn main() -> Result<(), Box<dyn Error>> {
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    // Messages are plain prost derives in src/wire.rs, so only the service
    // stubs are generated here.
    let collective = Service::builder()
        .name("Collective")
        .package("histlite")
        .method(
            Method::builder()
                .name("preflight")
                .route_name("Preflight")
                .input_type("crate::wire::PreflightRequest")
                .output_type("crate::wire::PreflightVerdict")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .method(
            Method::builder()
                .name("contribute")
                .route_name("Contribute")
                .input_type("crate::wire::HistogramBlock")
                .output_type("crate::wire::Ack")
                .codec_path("tonic::codec::ProstCodec")
                .build(),
        )
        .build();
    Builder::new()
        .build_client(true)
        .build_server(true)
        .out_dir(&out_dir)
        .compile(&[collective]);
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
