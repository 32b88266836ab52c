fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_build::configure().build_server(false).build_client(true).compile(
        &["proto/types.proto", "proto/kv.proto", "proto/ethbackend.proto", "proto/mining.proto", "proto/txpool.proto"],
        &["proto"],
    )?;
    Ok(())
}
