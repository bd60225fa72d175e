//! A small tour of the string domain: build, combine, query, render.
//!
//! Run with `cargo run --example strings`.

use log::info;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
use tokens_tree::dot::to_dot;
use tokens_tree::interval::{Bound, Interval};
use tokens_tree::tokens::{Direction, Tokens};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let hello = Tokens::constant("hello");
    let world = Tokens::constant("world");
    info!("hello = {}", hello);
    info!("world = {}", world);

    let greeting = hello.concat(&Tokens::constant(" ")).concat(&world);
    info!("greeting = {}", greeting);
    info!("length(greeting) = {}", greeting.length());
    info!(
        "greeting contains \"lo w\": {:?}",
        greeting.contains("lo w")
    );

    let either = hello.join(&world);
    info!("hello | world = {}", either);
    info!("starts_with(\"h\"): {:?}", either.starts_with("h"));

    let loops = Tokens::from_text("{a*b*}!")?;
    info!("loops = {}", loops);
    info!(
        "substring(greeting, 6, to end) = {}",
        greeting.substring(
            &Interval::constant(6),
            &Interval::new(Bound::PosInf, Bound::PosInf)
        )
    );
    info!(
        "pad(hello, 8, '.', right) = {}",
        hello.pad(&Interval::constant(8), '.', Direction::Backward)
    );

    if let Tokens::Tree(tree) = &loops {
        println!("{}", to_dot(tree)?);
    }
    Ok(())
}
