// self
use crate::auth::{AuthError, AuthErrorCode};

/// Status texts shown by the login page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginMessages {
	/// Shown while waiting for bootstrap.
	pub initializing: String,
	/// Prompt when nobody is signed in.
	pub choose_method: String,
	/// Prompt after a stale guest session was cleared.
	pub guest_hint: String,
	/// Guest sign-in finished; navigation follows.
	pub guest_signed_in: String,
	/// Federated sign-in finished; navigation follows.
	pub signed_in: String,
	/// Federated sign-in running.
	pub google_in_progress: String,
	/// Redirect to the federated provider started.
	pub google_redirecting: String,
	/// Guest sign-in running.
	pub guest_in_progress: String,
	/// Bootstrap failed without a recorded message.
	pub init_failed: String,
	/// Bootstrap did not finish in time.
	pub init_timeout: String,
	/// Error without a usable message.
	pub unknown_error: String,
	/// `auth/popup-closed-by-user`.
	pub popup_closed: String,
	/// `auth/cancelled-popup-request`.
	pub cancelled_popup: String,
	/// `auth/operation-not-allowed`.
	pub operation_not_allowed: String,
}
impl LoginMessages {
	/// Japanese texts (the default).
	pub fn japanese() -> Self {
		Self {
			initializing: "Firebase を初期化しています…".into(),
			choose_method: "ログイン方法を選択してください。".into(),
			guest_hint: "ゲストとして利用するには下のボタンを押してください。".into(),
			guest_signed_in: "ゲストとしてログインしました。ページへ移動します…".into(),
			signed_in: "ログインに成功しました。ページへ移動します…".into(),
			google_in_progress: "Google で認証中です…".into(),
			google_redirecting: "Google の認証ページへ移動します…".into(),
			guest_in_progress: "ゲストとしてログイン中です…".into(),
			init_failed: "Firebase の初期化に失敗しました。設定を確認してください。".into(),
			init_timeout: "Firebase の初期化がタイムアウトしました。".into(),
			unknown_error: "不明なエラーが発生しました。".into(),
			popup_closed: "ポップアップが閉じられました。もう一度お試しください。".into(),
			cancelled_popup: "別のポップアップ処理が進行中です。数秒後に再度お試しください。".into(),
			operation_not_allowed: "Firebase コンソールで対象のサインイン方法を有効化してください。"
				.into(),
		}
	}

	/// English texts.
	pub fn english() -> Self {
		Self {
			initializing: "Initializing Firebase…".into(),
			choose_method: "Choose how to sign in.".into(),
			guest_hint: "Press the button below to continue as a guest.".into(),
			guest_signed_in: "Signed in as a guest. Redirecting…".into(),
			signed_in: "Signed in. Redirecting…".into(),
			google_in_progress: "Authenticating with Google…".into(),
			google_redirecting: "Moving to the Google sign-in page…".into(),
			guest_in_progress: "Signing in as a guest…".into(),
			init_failed: "Firebase initialization failed. Check the configuration.".into(),
			init_timeout: "Firebase initialization timed out.".into(),
			unknown_error: "An unknown error occurred.".into(),
			popup_closed: "The popup was closed. Please try again.".into(),
			cancelled_popup: "Another popup is in progress. Try again in a few seconds.".into(),
			operation_not_allowed: "Enable this sign-in method in the Firebase console.".into(),
		}
	}

	/// Text for a failed sign-in: a mapped message for known codes, else the provider message.
	pub fn error_message(&self, err: &AuthError) -> String {
		match err.code {
			AuthErrorCode::PopupClosedByUser => self.popup_closed.clone(),
			AuthErrorCode::CancelledPopupRequest => self.cancelled_popup.clone(),
			AuthErrorCode::OperationNotAllowed => self.operation_not_allowed.clone(),
			_ if err.message.trim().is_empty() => self.unknown_error.clone(),
			_ => err.message.clone(),
		}
	}
}
impl Default for LoginMessages {
	fn default() -> Self {
		Self::japanese()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn known_codes_map_to_table_entries() {
		let messages = LoginMessages::default();

		assert_eq!(
			messages.error_message(&AuthError::from_code(AuthErrorCode::PopupClosedByUser)),
			"ポップアップが閉じられました。もう一度お試しください。"
		);
		assert_eq!(
			messages.error_message(&AuthError::from_code(AuthErrorCode::OperationNotAllowed)),
			"Firebase コンソールで対象のサインイン方法を有効化してください。"
		);
	}

	#[test]
	fn other_codes_use_provider_message() {
		let messages = LoginMessages::english();

		assert_eq!(
			messages.error_message(&AuthError::new(AuthErrorCode::InternalError, "Quota exceeded.")),
			"Quota exceeded."
		);
		assert_eq!(
			messages.error_message(&AuthError::new(AuthErrorCode::InternalError, " ")),
			"An unknown error occurred."
		);
	}
}
