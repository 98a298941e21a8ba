use thiserror::Error;

/// 配置驗證錯誤
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("缺少必要配置項: {0}")]
    MissingField(String),

    #[error("無效的配置值: {0}")]
    InvalidValue(String),

    #[error("配置範圍錯誤: {field} 的值 {value} 不在範圍 {min}..={max} 內")]
    RangeError {
        field: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("{dependent} 需要同時設定 {dependency}")]
    DependencyError {
        dependent: String,
        dependency: String,
    },
}

/// 配置區段驗證
pub trait Validator {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// 各區段共用的檢查
pub struct ValidationUtils;

impl ValidationUtils {
    /// 數值必須落在 `min..=max`
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + ToString,
    {
        if value < min || value > max {
            return Err(ValidationError::RangeError {
                field: field.to_string(),
                value: value.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            });
        }
        Ok(())
    }

    /// 字串選項，不分大小寫、忽略前後空白
    pub fn one_of(value: &str, options: &[&str], field: &str) -> Result<(), ValidationError> {
        let value = value.trim();
        if options.iter().any(|o| o.eq_ignore_ascii_case(value)) {
            return Ok(());
        }
        Err(ValidationError::InvalidValue(format!(
            "{field} 必須是 {} 之一，實際為 {value:?}",
            options.join(" / ")
        )))
    }

    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingField(field.to_string()));
        }
        Ok(())
    }

    /// 網址必須使用允許的 scheme
    pub fn has_scheme(value: &str, schemes: &[&str], field: &str) -> Result<(), ValidationError> {
        Self::not_empty(value, field)?;
        let matches = value
            .split_once("://")
            .is_some_and(|(scheme, _)| schemes.iter().any(|s| scheme.eq_ignore_ascii_case(s)));
        if !matches {
            return Err(ValidationError::InvalidValue(format!(
                "{field} 必須以 {} 開頭: {value}",
                schemes
                    .iter()
                    .map(|s| format!("{s}://"))
                    .collect::<Vec<_>>()
                    .join(" 或 ")
            )));
        }
        Ok(())
    }

    /// 指定了 `dependent` 時，`dependency` 也必須存在
    pub fn requires(
        dependent_set: bool,
        dependency_set: bool,
        dependent: &str,
        dependency: &str,
    ) -> Result<(), ValidationError> {
        if dependent_set && !dependency_set {
            return Err(ValidationError::DependencyError {
                dependent: dependent.to_string(),
                dependency: dependency.to_string(),
            });
        }
        Ok(())
    }
}
