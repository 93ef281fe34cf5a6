fn main() {
    if let Err(err) = flowvis_renderer::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
