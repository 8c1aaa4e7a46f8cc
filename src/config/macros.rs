/// Configuration macros for zero-repetition config definitions
///
/// `config_struct!` lets a configuration structure declare field name, type
/// and default value in a single place and generates:
/// - The struct with public fields
/// - The Default implementation with the specified values
/// - Serde support with `#[serde(default)]`
///
/// # Example
/// ```
/// use turtlebot::config_struct;
///
/// config_struct! {
///     pub struct StrategyConfig {
///         volatility_target: f64 = 0.25,
///         enabled: bool = true,
///     }
/// }
/// ```
#[macro_export]
macro_rules! config_struct {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_name:ident: $field_type:ty = $default_value:expr
            ),*
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        #[serde(default)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field_name: $field_type,
            )*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $(
                        $field_name: $default_value,
                    )*
                }
            }
        }
    };
}
