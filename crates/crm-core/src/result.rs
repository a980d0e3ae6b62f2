use crate::error::CrmError;

pub type CrmResult<T> = Result<T, CrmError>;
