use std::io::{self, Write};

use serde::Serialize;

use crate::domain::{Directory, LocalPokemon, ScreenPokemon};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_pokemons(pokemons: &[LocalPokemon]) -> io::Result<()> {
        Self::print_json(&pokemons)
    }

    pub fn print_pokemon(pokemon: &LocalPokemon) -> io::Result<()> {
        Self::print_json(pokemon)
    }

    pub fn print_screen(pokemon: &ScreenPokemon) -> io::Result<()> {
        Self::print_json(pokemon)
    }

    pub fn print_directory(directory: &Directory) -> io::Result<()> {
        Self::print_json(directory)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
