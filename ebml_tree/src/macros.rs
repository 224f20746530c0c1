macro_rules! try_vec {
	($elem:expr; $size:expr) => {{ $crate::util::alloc::fallible_vec_from_element($elem, $size)? }};
}

// Shorthand for return Err(EbmlError::new(ErrorKind::Foo))
//
// Usage:
// - err!(Variant)          -> return Err(EbmlError::new(ErrorKind::Variant))
// - err!(Variant(Message)) -> return Err(EbmlError::new(ErrorKind::Variant(Message)))
// - err!(Variant { .. })   -> return Err(EbmlError::new(ErrorKind::Variant { .. }))
macro_rules! err {
	($variant:ident) => {
		return Err($crate::error::EbmlError::new(
			$crate::error::ErrorKind::$variant,
		))
	};
	($variant:ident($reason:expr)) => {
		return Err($crate::error::EbmlError::new(
			$crate::error::ErrorKind::$variant($reason),
		))
	};
	// The body is taken as raw tokens so field shorthand works too
	($variant:ident { $($body:tt)+ }) => {
		return Err($crate::error::EbmlError::new(
			$crate::error::ErrorKind::$variant { $($body)+ },
		))
	};
}

// A macro for handling the different `ParsingMode`s
//
// NOTE: All fields are optional, if `STRICT` or `RELAXED` are missing, it will
// 		 fall through to `DEFAULT`. If `DEFAULT` is missing, it will fall through
// 		 to an empty block.
//
// Usage:
//
// - parse_mode_choice!(
// 		ident_of_parsing_mode,
// 		STRICT: some_expr,
// 		RELAXED: some_expr,
// 		DEFAULT: some_expr,
// 	 )
macro_rules! parse_mode_choice {
	(
		$parse_mode:ident,
		$(STRICT: $strict_handler:expr,)?
		$(BESTATTEMPT: $best_attempt_handler:expr,)?
		$(RELAXED: $relaxed_handler:expr,)?
		DEFAULT: $default:expr
	) => {
		match $parse_mode {
			$($crate::config::ParsingMode::Strict => { $strict_handler },)?
			$($crate::config::ParsingMode::BestAttempt => { $best_attempt_handler },)?
			$($crate::config::ParsingMode::Relaxed => { $relaxed_handler },)?
			_ => { $default }
		}
	};
}

pub(crate) use {err, parse_mode_choice, try_vec};
