//! Bet records and line parsing.
//!
//! A bet travels on the wire as five comma-separated fields:
//! `name,surname,dni,birthdate,number`. The batcher never looks inside a
//! record; it only consumes the serialized bytes via
//! [`MarshalPayload`](crate::protocol::MarshalPayload).

use bytes::Bytes;

use crate::error::{BetwireError, Result};
use crate::protocol::MarshalPayload;

/// Raw, unvalidated bet fields as read from a record line.
#[derive(Debug, Clone, Default)]
pub struct Bettor {
    pub name: String,
    pub surname: String,
    pub dni: String,
    pub birthdate: String,
    pub bet_number: String,
}

/// A validated bet record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bet {
    name: String,
    surname: String,
    dni: String,
    birthdate: String,
    number: u32,
}

impl Bet {
    /// Validate raw bettor fields into a bet.
    pub fn new(raw: Bettor) -> Result<Self> {
        validate_birthdate(&raw.birthdate)?;
        let number = raw
            .bet_number
            .parse::<u32>()
            .map_err(|e| BetwireError::InvalidRecord(format!("invalid bet number: {}", e)))?;
        Ok(Self {
            name: raw.name,
            surname: raw.surname,
            dni: raw.dni,
            birthdate: raw.birthdate,
            number,
        })
    }

    /// Parse a comma-separated record line with exactly five fields.
    pub fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 5 {
            return Err(BetwireError::InvalidRecord(format!(
                "expected 5 fields, got {}",
                fields.len()
            )));
        }
        Self::new(Bettor {
            name: fields[0].to_string(),
            surname: fields[1].to_string(),
            dni: fields[2].to_string(),
            birthdate: fields[3].to_string(),
            bet_number: fields[4].to_string(),
        })
    }

    /// Bettor identifier.
    pub fn dni(&self) -> &str {
        &self.dni
    }

    /// Bet number.
    pub fn number(&self) -> u32 {
        self.number
    }
}

impl MarshalPayload for Bet {
    fn marshal_payload(&self) -> Bytes {
        let text = format!(
            "{},{},{},{},{}",
            self.name, self.surname, self.dni, self.birthdate, self.number
        );
        Bytes::from(text.into_bytes())
    }
}

/// Check `YYYY-MM-DD` shape with numeric range checks.
fn validate_birthdate(s: &str) -> Result<()> {
    let invalid = || BetwireError::InvalidRecord(format!("invalid birthdate: {:?}", s));
    let parts: Vec<&str> = s.split('-').collect();
    if parts.len() != 3 {
        return Err(invalid());
    }
    let year: u16 = parts[0].parse().map_err(|_| invalid())?;
    let month: u8 = parts[1].parse().map_err(|_| invalid())?;
    let day: u8 = parts[2].parse().map_err(|_| invalid())?;
    if year < 1000 || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_line() {
        let bet = Bet::parse_line("Julio,Cortazar,52820003,1999-03-17,7574").unwrap();
        assert_eq!(bet.dni(), "52820003");
        assert_eq!(bet.number(), 7574);
    }

    #[test]
    fn test_marshal_payload_csv_layout() {
        let bet = Bet::parse_line("Julio,Cortazar,52820003,1999-03-17,7574").unwrap();
        assert_eq!(
            &bet.marshal_payload()[..],
            b"Julio,Cortazar,52820003,1999-03-17,7574"
        );
    }

    #[test]
    fn test_wrong_field_count_rejected() {
        let err = Bet::parse_line("Julio,Cortazar,52820003,1999-03-17").unwrap_err();
        assert!(err.to_string().contains("expected 5 fields"));
    }

    #[test]
    fn test_invalid_birthdate_rejected() {
        assert!(Bet::parse_line("A,B,1,17-03-1999,1").is_err());
        assert!(Bet::parse_line("A,B,1,1999-13-01,1").is_err());
        assert!(Bet::parse_line("A,B,1,not-a-date,1").is_err());
    }

    #[test]
    fn test_invalid_bet_number_rejected() {
        let err = Bet::parse_line("A,B,1,1999-03-17,notanumber").unwrap_err();
        assert!(err.to_string().contains("invalid bet number"));
    }
}
