use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Entertainment,
    Education,
    Utilities,
    Lifestyle,
    Other,
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let category = match self {
            Category::Entertainment => "entertainment",
            Category::Education => "education",
            Category::Utilities => "utilities",
            Category::Lifestyle => "lifestyle",
            Category::Other => "other",
        };
        write!(f, "{}", category)
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "entertainment" => Ok(Category::Entertainment),
            "education" => Ok(Category::Education),
            "utilities" => Ok(Category::Utilities),
            "lifestyle" => Ok(Category::Lifestyle),
            "other" => Ok(Category::Other),
            other => Err(ValidationError::UnknownCategory(other.to_string())),
        }
    }
}
