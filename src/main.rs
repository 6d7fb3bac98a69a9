fn main() {
    if let Err(err) = mindmap_rs_canvas::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
