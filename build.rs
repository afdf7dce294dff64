use std::error::Error;

use vergen_gitcl::{CargoBuilder, Emitter, GitclBuilder};

fn main() -> Result<(), Box<dyn Error>> {
	Emitter::default()
		.add_instructions(&CargoBuilder::default().target_triple(true).build()?)?
		.add_instructions(&GitclBuilder::default().sha(true).build()?)?
		.emit()?;

	Ok(())
}
