//! # Navigation State Types
//!
//! Screens of the client and the observable navigation state.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::core::error::AppError;

/// Application screens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Screen {
    /// Launch screen shown while the session is restored
    #[default]
    Splash,
    /// Sign-in form (unauthenticated entry screen)
    Login,
    /// Account registration form
    Register,
    /// Dashboard with balance and shortcuts
    Home,
    Deposit,
    Withdraw,
    /// Peer-to-peer transfer
    Transfer,
    /// Investment funds
    Funds,
    Shop,
    AccountHistory,
    WithdrawalHistory,
    PurchaseHistory,
    Profile,
    Settings,
}

impl Screen {
    /// Get all screens in menu order
    pub fn all() -> &'static [Screen] {
        &[
            Screen::Splash,
            Screen::Login,
            Screen::Register,
            Screen::Home,
            Screen::Deposit,
            Screen::Withdraw,
            Screen::Transfer,
            Screen::Funds,
            Screen::Shop,
            Screen::AccountHistory,
            Screen::WithdrawalHistory,
            Screen::PurchaseHistory,
            Screen::Profile,
            Screen::Settings,
        ]
    }

    /// Get screen title for header display
    pub fn title(&self) -> &'static str {
        match self {
            Screen::Splash => "Welcome",
            Screen::Login => "Sign In",
            Screen::Register => "Create Account",
            Screen::Home => "Home",
            Screen::Deposit => "Deposit",
            Screen::Withdraw => "Withdraw",
            Screen::Transfer => "Transfer",
            Screen::Funds => "Investment Funds",
            Screen::Shop => "Shop",
            Screen::AccountHistory => "Account History",
            Screen::WithdrawalHistory => "Withdrawal History",
            Screen::PurchaseHistory => "Purchase History",
            Screen::Profile => "Profile",
            Screen::Settings => "Settings",
        }
    }

    /// Stable page identifier
    pub fn id(&self) -> &'static str {
        match self {
            Screen::Splash => "splash",
            Screen::Login => "login",
            Screen::Register => "register",
            Screen::Home => "home",
            Screen::Deposit => "deposit",
            Screen::Withdraw => "withdraw",
            Screen::Transfer => "transfer",
            Screen::Funds => "funds",
            Screen::Shop => "shop",
            Screen::AccountHistory => "account-history",
            Screen::WithdrawalHistory => "withdrawal-history",
            Screen::PurchaseHistory => "purchase-history",
            Screen::Profile => "profile",
            Screen::Settings => "settings",
        }
    }

    /// Reachable without a session
    pub fn is_public(&self) -> bool {
        matches!(self, Screen::Login | Screen::Register | Screen::Splash)
    }

    /// Check if a screen requires authentication
    pub fn requires_auth(&self) -> bool {
        !self.is_public()
    }

    /// Data-heavy screens whose transition is deferred behind a loading indicator
    pub fn is_heavy(&self) -> bool {
        matches!(
            self,
            Screen::AccountHistory
                | Screen::WithdrawalHistory
                | Screen::PurchaseHistory
                | Screen::Shop
        )
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Screen {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        Screen::all()
            .iter()
            .copied()
            .find(|screen| screen.id().eq_ignore_ascii_case(id))
            .ok_or_else(|| AppError::Validation(format!("Unknown screen: {}", id)))
    }
}

/// Active screen plus the payload handed over by whoever navigated there.
///
/// Replaced as a whole on every committed navigation; never persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NavigationState {
    pub screen: Screen,
    pub payload: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip_through_from_str() {
        for screen in Screen::all() {
            assert_eq!(screen.id().parse::<Screen>().unwrap(), *screen);
        }
        assert_eq!(" Account-History ".parse::<Screen>().unwrap(), Screen::AccountHistory);
    }

    #[test]
    fn test_unknown_id_is_validation_error() {
        let err = "casino".parse::<Screen>().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_public_and_heavy_sets() {
        let public: Vec<Screen> = Screen::all().iter().copied().filter(|s| s.is_public()).collect();
        assert_eq!(public, vec![Screen::Splash, Screen::Login, Screen::Register]);

        let heavy: Vec<Screen> = Screen::all().iter().copied().filter(|s| s.is_heavy()).collect();
        assert_eq!(
            heavy,
            vec![
                Screen::Shop,
                Screen::AccountHistory,
                Screen::WithdrawalHistory,
                Screen::PurchaseHistory
            ]
        );
        assert!(heavy.iter().all(|s| s.requires_auth()));
    }

    #[test]
    fn test_initial_state() {
        let state = NavigationState::default();
        assert_eq!(state.screen, Screen::Splash);
        assert!(state.payload.is_none());
    }
}
