use std::str::FromStr;

use geo_store::GeoPoint;
use sightings::PokemonId;

pub const HELP: &str = "\
spot               record a random Pokemon at the map center
pan <lat> <lon>    move the map center
locate <lat> <lon> report a new user location
markers            list the markers on the map
tap <number>       directions to a Pokemon's marker
help               show this help
quit               leave";

#[derive(Debug, PartialEq)]
pub enum Command {
    Spot,
    Pan(GeoPoint),
    Locate(GeoPoint),
    Markers,
    Tap(PokemonId),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();

        match words.as_slice() {
            ["spot"] => Ok(Command::Spot),
            ["pan", lat, lon] => Ok(Command::Pan(parse_point(lat, lon)?)),
            ["locate", lat, lon] => Ok(Command::Locate(parse_point(lat, lon)?)),
            ["markers"] => Ok(Command::Markers),
            ["tap", number] => {
                let number: i64 = number
                    .parse()
                    .map_err(|_| format!("Not a number: {}", number))?;
                PokemonId::new(number)
                    .map(Command::Tap)
                    .map_err(|e| e.to_string())
            }
            ["help"] => Ok(Command::Help),
            ["quit"] | ["exit"] => Ok(Command::Quit),
            [] => Err("Empty command".to_string()),
            [other, ..] => Err(format!("Unknown command or arguments: {} (try help)", other)),
        }
    }
}

fn parse_point(lat: &str, lon: &str) -> Result<GeoPoint, String> {
    let latitude: f64 = lat.parse().map_err(|_| format!("Not a latitude: {}", lat))?;
    let longitude: f64 = lon.parse().map_err(|_| format!("Not a longitude: {}", lon))?;
    GeoPoint::new(latitude, longitude).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!("spot".parse::<Command>().unwrap(), Command::Spot);
        assert_eq!(
            "  pan -34.6 -58.4 ".parse::<Command>().unwrap(),
            Command::Pan(GeoPoint::new(-34.6, -58.4).unwrap())
        );
        assert_eq!(
            "tap 25".parse::<Command>().unwrap(),
            Command::Tap(PokemonId::new(25).unwrap())
        );
        assert_eq!("exit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn rejects_bad_input() {
        assert!("".parse::<Command>().is_err());
        assert!("pan 1".parse::<Command>().is_err());
        assert!("locate 100 0".parse::<Command>().is_err());
        assert!("tap 152".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
    }
}
