//! Error types and handling for the outfitcast application

use thiserror::Error;

/// Main error type for the outfitcast application
#[derive(Error, Debug)]
pub enum OutfitError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The consumer of a streamed report went away before it finished
    #[error("Report consumer disconnected")]
    Disconnected,

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// Model loading or text generation errors
    #[error("Inference error: {message}")]
    Inference { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// General application errors
    #[error("Application error: {message}")]
    General { message: String },
}

impl OutfitError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new inference error
    pub fn inference<S: Into<String>>(message: S) -> Self {
        Self::Inference {
            message: message.into(),
        }
    }

    /// Create a new general error
    pub fn general<S: Into<String>>(message: S) -> Self {
        Self::General {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            OutfitError::Config { .. } => {
                "Erro de configuração. Verifique o arquivo de configuração e as chaves de API."
                    .to_string()
            }
            OutfitError::Disconnected => {
                "Conexão encerrada antes do fim da previsão.".to_string()
            }
            OutfitError::Validation { message } => {
                format!("Entrada inválida: {message}")
            }
            OutfitError::Inference { .. } => {
                "Não foi possível gerar a recomendação de vestuário. Tente novamente."
                    .to_string()
            }
            OutfitError::Io { .. } => {
                "Falha em operação de arquivo. Verifique as permissões.".to_string()
            }
            OutfitError::General { message } => message.clone(),
        }
    }
}

impl From<candle_core::Error> for OutfitError {
    fn from(err: candle_core::Error) -> Self {
        OutfitError::inference(err.to_string())
    }
}

impl From<tokio::task::JoinError> for OutfitError {
    fn from(err: tokio::task::JoinError) -> Self {
        OutfitError::inference(format!("generation task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = OutfitError::config("missing API key");
        assert!(matches!(config_err, OutfitError::Config { .. }));


        let inference_err = OutfitError::inference("out of memory");
        assert!(matches!(inference_err, OutfitError::Inference { .. }));
    }

    #[test]
    fn test_user_messages() {
        let config_err = OutfitError::config("test");
        assert!(config_err.user_message().contains("configuração"));

        assert!(OutfitError::Disconnected.user_message().contains("Conexão encerrada"));

        let validation_err = OutfitError::validation("cidade vazia");
        assert!(validation_err.user_message().contains("cidade vazia"));
    }

    #[test]
    fn test_display_keeps_detail() {
        let err = OutfitError::inference("tokenizer.json missing");
        assert_eq!(err.to_string(), "Inference error: tokenizer.json missing");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: OutfitError = io_err.into();
        assert!(matches!(err, OutfitError::Io { .. }));
    }
}
