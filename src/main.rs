use lvshift::LvShiftError;
use lvshift::output as out;
use lvshift::{app, cli};

fn main() {
    let args = cli::parse();
    if let Err(e) = app::run(args) {
        out::print_error(&format!("{e:#}"));
        let code = e
            .downcast_ref::<LvShiftError>()
            .map_or(1, LvShiftError::code);
        std::process::exit(code);
    }
}
