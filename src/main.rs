fn main() {
    dotenv::dotenv().ok();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Error: {err:?}");
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(uni_volume_notifier::run()) {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
