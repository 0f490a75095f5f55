// ⚠️ Error taxonomy - what can go wrong between upload and itinerary
// Every variant is turned into a user-visible message at the boundary (CLI, TUI, HTTP)

use serde::Serialize;

/// RouteError - Everything the boundary layer has to report to the user
///
/// Malformed fields on a single row are NOT represented here: they degrade to
/// empty components inside the resolver and never fail a carrier's route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail")]
pub enum RouteError {
    /// Routing credential missing or rejected by the service (fatal for the session)
    Configuration(String),

    /// Uploaded table lacks required columns (recoverable, user re-uploads)
    MissingColumns {
        required: Vec<String>,
        missing: Vec<String>,
    },

    /// File could not be read or parsed as a table
    Load(String),

    /// Routing service answered but produced no itinerary (e.g. invalid addresses)
    EmptyRoute,

    /// Network, HTTP or response-shape failure talking to the routing service
    Routing(String),
}

impl RouteError {
    /// Fatal errors stop the session; everything else lets the user retry
    pub fn is_fatal(&self) -> bool {
        matches!(self, RouteError::Configuration(_))
    }
}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteError::Configuration(msg) => {
                write!(f, "Routing service configuration error: {}", msg)
            }
            RouteError::MissingColumns { required, .. } => write!(
                f,
                "The file must contain the columns: {}.",
                required.join(", ")
            ),
            RouteError::Load(msg) => write!(f, "Could not read the file: {}", msg),
            RouteError::EmptyRoute => write!(
                f,
                "The routing service returned no route. Check that the addresses are valid."
            ),
            RouteError::Routing(msg) => write!(f, "Routing service error: {}", msg),
        }
    }
}

impl std::error::Error for RouteError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message_lists_required_names() {
        let err = RouteError::MissingColumns {
            required: vec!["COD-VETTORE".into(), "INDIRIZZO".into(), "LOCALITA".into()],
            missing: vec!["LOCALITA".into()],
        };

        assert_eq!(
            err.to_string(),
            "The file must contain the columns: COD-VETTORE, INDIRIZZO, LOCALITA."
        );
    }

    #[test]
    fn test_only_configuration_is_fatal() {
        assert!(RouteError::Configuration("missing key".into()).is_fatal());
        assert!(!RouteError::EmptyRoute.is_fatal());
        assert!(!RouteError::Load("bad file".into()).is_fatal());
        assert!(!RouteError::Routing("timeout".into()).is_fatal());
    }
}
