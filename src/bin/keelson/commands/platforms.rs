//! `keelson platforms` command

use anyhow::Result;

use keelson::{component, platform};

pub fn execute() -> Result<()> {
    let platforms = platform::builtin_registry();
    let components = component::builtin_registry();

    println!("Platforms:");
    for name in platforms.names() {
        if let Some(backend) = platforms.get(name) {
            println!("  {:<12} {}", name, backend.description());
        }
    }

    println!();
    println!("Components:");
    for name in components.names() {
        if let Some(component) = components.get(name) {
            println!("  {:<12} {}", name, component.description());
        }
    }

    Ok(())
}
