use std::ffi::OsStr;
use std::path::PathBuf;

use cdw_core::pointcloud::point::PointCloud;

use crate::error::ParseError;

pub mod csv;
pub mod las;

pub trait ParserProvider {
    fn get_parser(&self) -> Box<dyn Parser>;
}

pub trait Parser {
    fn parse(&self) -> Result<PointCloud, ParseError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    Las,
    Laz,
    Csv,
    Txt,
}

pub fn get_extension(extension: &str) -> Result<Extension, ParseError> {
    match extension.to_ascii_lowercase().as_str() {
        "las" => Ok(Extension::Las),
        "laz" => Ok(Extension::Laz),
        "csv" => Ok(Extension::Csv),
        "txt" => Ok(Extension::Txt),
        other => Err(ParseError::UnsupportedExtension(other.to_string())),
    }
}

/// The single extension shared by every input file.
pub fn check_and_get_extension(paths: &[PathBuf]) -> Result<Extension, ParseError> {
    let mut extensions = vec![];
    for path in paths {
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) => extensions.push(ext.to_ascii_lowercase()),
            None => return Err(ParseError::MissingExtension(path.clone())),
        }
    }
    extensions.sort();
    extensions.dedup();

    match extensions.as_slice() {
        [] => Err(ParseError::NoInput),
        [ext] => get_extension(ext),
        _ => Err(ParseError::MixedExtensions(extensions)),
    }
}

/// Parser provider for the files' common extension.
pub fn provider_for(filenames: Vec<PathBuf>) -> Result<Box<dyn ParserProvider>, ParseError> {
    let provider: Box<dyn ParserProvider> = match check_and_get_extension(&filenames)? {
        Extension::Las | Extension::Laz => Box::new(las::LasParserProvider { filenames }),
        Extension::Csv | Extension::Txt => Box::new(csv::CsvParserProvider { filenames }),
    };
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        assert_eq!(get_extension("LAZ").unwrap(), Extension::Laz);
        assert_eq!(get_extension("txt").unwrap(), Extension::Txt);
        assert!(matches!(
            get_extension("ply"),
            Err(ParseError::UnsupportedExtension(_))
        ));
    }

    #[test]
    fn mixed_or_missing_extensions_are_rejected() {
        let same = vec![PathBuf::from("a.las"), PathBuf::from("b.LAS")];
        assert_eq!(check_and_get_extension(&same).unwrap(), Extension::Las);

        let mixed = vec![PathBuf::from("a.las"), PathBuf::from("b.csv")];
        assert!(matches!(
            check_and_get_extension(&mixed),
            Err(ParseError::MixedExtensions(_))
        ));

        let bare = vec![PathBuf::from("points")];
        assert!(matches!(
            check_and_get_extension(&bare),
            Err(ParseError::MissingExtension(_))
        ));

        assert!(matches!(check_and_get_extension(&[]), Err(ParseError::NoInput)));
    }
}
