#![forbid(unsafe_code)]

//! Binary entrypoint for `cbfs-restore`.

#[tokio::main]
async fn main() {
    let exit_code = cbfs_restore::run().await;
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
