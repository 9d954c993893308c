use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DexError;

/// Numeric key used for remote lookups. Always positive; no upper bound is
/// enforced here, unknown identifiers are the remote's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PokemonId(u32);

impl PokemonId {
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PokemonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PokemonId {
    type Err = DexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let parsed = trimmed
            .parse::<u32>()
            .map_err(|_| DexError::InvalidIdentifier(value.to_string()))?;
        if parsed == 0 {
            return Err(DexError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(parsed))
    }
}

impl TryFrom<u32> for PokemonId {
    type Error = DexError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value == 0 {
            return Err(DexError::InvalidIdentifier(value.to_string()));
        }
        Ok(Self(value))
    }
}

/// Decoded remote response. Immutable once decoded; lives only in the
/// provider's staged slot until caught or discarded.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Pokemon {
    pub id: u32,
    pub name: String,
    pub order: i32,
    pub weight: u32,
    pub height: u32,
    pub sprites: Sprites,
    pub species: Species,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Sprites {
    pub front_default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Species {
    pub name: String,
    pub url: String,
}

/// A caught pokemon as it sits in the durable collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalPokemon {
    pub id: u32,
    pub name: String,
    pub order: i32,
    pub weight: u32,
    pub height: u32,
    pub icon_path: Option<String>,
    pub species: String,
    pub caught_at: String,
}

impl LocalPokemon {
    pub fn from_remote(pokemon: &Pokemon) -> Self {
        Self {
            id: pokemon.id,
            name: pokemon.name.clone(),
            order: pokemon.order,
            weight: pokemon.weight,
            height: pokemon.height,
            icon_path: pokemon.sprites.front_default.clone(),
            species: pokemon.species.name.clone(),
            caught_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Directory sort key. `order` comes from the remote and can be negative
    /// for special forms, so ties fall back to the identifier.
    pub fn sort_key(&self) -> (i32, u32) {
        (self.order, self.id)
    }
}

/// Display projection of a fetched-but-not-caught pokemon.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenPokemon {
    pub name: String,
    pub weight: u32,
    pub height: u32,
    pub icon_path: Option<String>,
}

impl ScreenPokemon {
    pub fn from_remote(pokemon: &Pokemon) -> Self {
        Self {
            name: pokemon.name.clone(),
            weight: pokemon.weight,
            height: pokemon.height,
            icon_path: pokemon.sprites.front_default.clone(),
        }
    }
}

/// Read-only grouping of the collection into sections by first letter.
/// Sections are alphabetical; entries keep the collection's sort order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Directory {
    pub sections: Vec<DirectorySection>,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectorySection {
    pub letter: char,
    pub entries: Vec<String>,
}

impl Directory {
    pub fn from_collection(pokemons: &[LocalPokemon]) -> Self {
        let mut sections: Vec<DirectorySection> = Vec::new();
        for pokemon in pokemons {
            let letter = pokemon
                .name
                .chars()
                .next()
                .map(|ch| ch.to_ascii_uppercase())
                .unwrap_or('#');
            match sections.iter_mut().find(|section| section.letter == letter) {
                Some(section) => section.entries.push(pokemon.name.clone()),
                None => sections.push(DirectorySection {
                    letter,
                    entries: vec![pokemon.name.clone()],
                }),
            }
        }
        sections.sort_by_key(|section| section.letter);
        Self {
            sections,
            total: pokemons.len(),
        }
    }
}
