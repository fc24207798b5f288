use flow_playground::{app, config::Config, context::Context, scenes};

fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let scene = match std::env::args().nth(1).as_deref() {
        Some("night") => scenes::night_playground(),
        _ => scenes::playground(),
    };
    app::run(scene, config, |window| {
        futures::executor::block_on(Context::new(window))
    })
}
