fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_file = "./proto/demo.proto";

    tonic_build::configure()
        .build_client(true)
        .build_server(true)
        .compile(&[proto_file], &["proto"])?;
    Ok(())
}
