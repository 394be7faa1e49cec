use log::error;

fn main() {
    env_logger::init();

    if let Err(e) = ais_tracks::get_arg().and_then(ais_tracks::run) {
        error!("{e:#}");
        std::process::exit(1);
    }
}
