//! Lists the demo patches.

use clap::Args;

use crate::patches::Patch;

#[derive(Args)]
pub struct PatchesArgs {}

pub fn run(_args: PatchesArgs) -> anyhow::Result<()> {
    println!("Available Patches");
    println!("=================");
    for patch in Patch::ALL {
        println!("  {:<10} {}", patch.name(), patch.description());
    }
    Ok(())
}
