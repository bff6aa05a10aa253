use std::io;

use crate::error::{InvalidRegisterError, ParseDeclError, PlanError, RenderError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid register")]
    InvalidRegister(#[from] InvalidRegisterError),
    #[error("cannot plan register file address space")]
    Plan(#[from] PlanError),
    #[error("cannot read register file declaration")]
    Parse(#[from] ParseDeclError),
    #[error("cannot render register file")]
    Render(#[from] RenderError),
    #[error("file access failed")]
    Io(#[from] io::Error),
}
