//! The pair ledger: reserve accounting and the LP-share cap table.
//!
//! All mutation goes through the three primitives (`mint`, `burn`,
//! `swap`), each gated on the router bound at construction and applied
//! inside a single critical section. Candidate state is computed and
//! checked in full before anything is written, so a failed call leaves no
//! observable partial update.

use parking_lot::Mutex;
use tracing::{debug, error};

use crate::constants::{FEE_DENOMINATOR, FEE_NUMERATOR, LOCK_ADDRESS, MINIMUM_LOCKED_SHARES};
use crate::errors::AmmError;
use crate::ledger::Address;
use crate::math::{integer_sqrt, mul_div_floor, narrow, U256};
use crate::state::{PairState, PoolEvent, PoolSnapshot, SwapDirection};

/// A single native/token pair: two reserves plus outstanding LP shares.
pub struct Pair {
    address: Address,
    router: Address,
    state: Mutex<PairState>,
}

impl Pair {
    pub(crate) fn new(address: Address, router: Address) -> Self {
        Self {
            address,
            router,
            state: Mutex::new(PairState::default()),
        }
    }

    /// Address under which the pair holds custody of both assets.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The only address allowed to call the mutating primitives.
    pub fn bound_router(&self) -> Address {
        self.router
    }

    pub fn reserves(&self) -> (u128, u128) {
        let state = self.state.lock();
        (state.reserve_native, state.reserve_token)
    }

    pub fn total_shares(&self) -> u128 {
        self.state.lock().total_shares
    }

    pub fn share_balance_of(&self, holder: Address) -> u128 {
        *self.state.lock().share_balances.get(&holder).unwrap_or(&0)
    }

    pub fn share_allowance(&self, owner: Address, spender: Address) -> u128 {
        *self
            .state
            .lock()
            .share_allowances
            .get(&(owner, spender))
            .unwrap_or(&0)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let state = self.state.lock();
        PoolSnapshot {
            reserve_native: state.reserve_native,
            reserve_token: state.reserve_token,
            total_shares: state.total_shares,
        }
    }

    /// Drain the observable event log.
    pub fn take_events(&self) -> Vec<PoolEvent> {
        std::mem::take(&mut self.state.lock().events)
    }

    /// Grant `spender` the right to move up to `amount` of `owner`'s shares.
    pub fn approve_shares(&self, owner: Address, spender: Address, amount: u128) {
        self.state
            .lock()
            .share_allowances
            .insert((owner, spender), amount);
    }

    /// Move LP shares between holders on the authority of `from`.
    pub fn transfer_shares(
        &self,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), AmmError> {
        let mut state = self.state.lock();
        Self::move_shares(&mut state, from, to, amount)
    }

    /// Move LP shares out of `owner`, spending `spender`'s allowance.
    pub fn transfer_shares_from(
        &self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), AmmError> {
        let mut state = self.state.lock();
        let allowance = *state.share_allowances.get(&(owner, spender)).unwrap_or(&0);
        let remaining = allowance
            .checked_sub(amount)
            .ok_or(AmmError::InsufficientShares)?;
        Self::move_shares(&mut state, owner, to, amount)?;
        state.share_allowances.insert((owner, spender), remaining);
        Ok(())
    }

    fn move_shares(
        state: &mut PairState,
        from: Address,
        to: Address,
        amount: u128,
    ) -> Result<(), AmmError> {
        let debited = state
            .share_balances
            .get(&from)
            .copied()
            .unwrap_or(0)
            .checked_sub(amount)
            .ok_or(AmmError::InsufficientShares)?;
        if from == to {
            return Ok(());
        }
        let credited = state
            .share_balances
            .get(&to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(AmmError::ArithmeticOverflow)?;
        state.share_balances.insert(from, debited);
        state.share_balances.insert(to, credited);
        Ok(())
    }

    /// Issue LP shares against a deposit already moved into custody.
    ///
    /// The first mint issues `floor(sqrt(a * b))` shares in total, with
    /// [`MINIMUM_LOCKED_SHARES`] going to the permanent lock address.
    /// Later mints issue the floor of the smaller of the two reserve
    /// ratios, so a provider never receives shares unbacked by deposit.
    pub fn mint(
        &self,
        caller: Address,
        provider: Address,
        amount_native: u128,
        amount_token: u128,
    ) -> Result<u128, AmmError> {
        self.ensure_router(caller)?;
        if amount_native == 0 || amount_token == 0 {
            return Err(AmmError::ZeroAmount);
        }

        let mut state = self.state.lock();

        let new_reserve_native = state
            .reserve_native
            .checked_add(amount_native)
            .ok_or(AmmError::ArithmeticOverflow)?;
        let new_reserve_token = state
            .reserve_token
            .checked_add(amount_token)
            .ok_or(AmmError::ArithmeticOverflow)?;

        let issued = if state.total_shares == 0 {
            let total = narrow(integer_sqrt(
                U256::from(amount_native) * U256::from(amount_token),
            ))?;
            if total <= MINIMUM_LOCKED_SHARES {
                return Err(AmmError::InsufficientInitialLiquidity);
            }
            let issued = total - MINIMUM_LOCKED_SHARES;
            Self::move_shares_into(&mut state, LOCK_ADDRESS, MINIMUM_LOCKED_SHARES)?;
            Self::move_shares_into(&mut state, provider, issued)?;
            state.total_shares = total;
            issued
        } else {
            let by_native = mul_div_floor(amount_native, state.total_shares, state.reserve_native)?;
            let by_token = mul_div_floor(amount_token, state.total_shares, state.reserve_token)?;
            let issued = by_native.min(by_token);
            let new_total = state
                .total_shares
                .checked_add(issued)
                .ok_or(AmmError::ArithmeticOverflow)?;
            Self::move_shares_into(&mut state, provider, issued)?;
            state.total_shares = new_total;
            issued
        };

        state.reserve_native = new_reserve_native;
        state.reserve_token = new_reserve_token;
        state.events.push(PoolEvent::LiquidityMinted {
            provider,
            amount_native,
            amount_token,
            shares_issued: issued,
        });
        debug!(
            amount_native,
            amount_token, issued, "liquidity minted"
        );
        Ok(issued)
    }

    /// Burn shares held in pair custody and pay out both reserves pro rata.
    pub fn burn(
        &self,
        caller: Address,
        recipient: Address,
        share_amount: u128,
    ) -> Result<(u128, u128), AmmError> {
        self.ensure_router(caller)?;
        if share_amount == 0 {
            return Err(AmmError::ZeroAmount);
        }

        let mut state = self.state.lock();
        if state.total_shares == 0 || share_amount > state.total_shares {
            return Err(AmmError::InsufficientShares);
        }
        let custody = state
            .share_balances
            .get(&self.address)
            .copied()
            .unwrap_or(0);
        let remaining_custody = custody
            .checked_sub(share_amount)
            .ok_or(AmmError::InsufficientShares)?;

        let native_out = mul_div_floor(share_amount, state.reserve_native, state.total_shares)?;
        let token_out = mul_div_floor(share_amount, state.reserve_token, state.total_shares)?;

        state.share_balances.insert(self.address, remaining_custody);
        state.total_shares -= share_amount;
        // Floor payouts never exceed the reserves they were derived from.
        state.reserve_native -= native_out;
        state.reserve_token -= token_out;
        state.events.push(PoolEvent::LiquidityBurned {
            provider: recipient,
            share_amount,
            native_out,
            token_out,
        });
        debug!(share_amount, native_out, token_out, "liquidity burned");
        Ok((native_out, token_out))
    }

    /// Apply a swap whose input funds are already in pair custody.
    ///
    /// Reserves are updated to `r + in - out` on each side, then the
    /// fee-adjusted constant product is checked; the update is discarded
    /// entirely if the product would shrink. This is the single
    /// correctness gate against undercharged swaps.
    pub fn swap(
        &self,
        caller: Address,
        trader: Address,
        native_in: u128,
        token_in: u128,
        native_out: u128,
        token_out: u128,
    ) -> Result<(), AmmError> {
        self.ensure_router(caller)?;
        if native_in == 0 && token_in == 0 {
            return Err(AmmError::ZeroAmount);
        }

        let mut state = self.state.lock();

        let new_reserve_native = state
            .reserve_native
            .checked_add(native_in)
            .and_then(|r| r.checked_sub(native_out))
            .ok_or(AmmError::ArithmeticOverflow)?;
        let new_reserve_token = state
            .reserve_token
            .checked_add(token_in)
            .and_then(|r| r.checked_sub(token_out))
            .ok_or(AmmError::ArithmeticOverflow)?;

        // Fee-adjusted invariant: discount each input by the 3/1000 fee
        // and require the product not to shrink.
        let fee_share = FEE_DENOMINATOR - FEE_NUMERATOR;
        let adjusted_native = (U256::from(new_reserve_native) * U256::from(FEE_DENOMINATOR))
            .checked_sub(U256::from(native_in) * U256::from(fee_share))
            .ok_or(AmmError::InvariantViolation)?;
        let adjusted_token = (U256::from(new_reserve_token) * U256::from(FEE_DENOMINATOR))
            .checked_sub(U256::from(token_in) * U256::from(fee_share))
            .ok_or(AmmError::InvariantViolation)?;
        let product_after = adjusted_native
            .checked_mul(adjusted_token)
            .ok_or(AmmError::ArithmeticOverflow)?;
        let product_before = (U256::from(state.reserve_native) * U256::from(state.reserve_token))
            .checked_mul(U256::from(FEE_DENOMINATOR) * U256::from(FEE_DENOMINATOR))
            .ok_or(AmmError::ArithmeticOverflow)?;
        if product_after < product_before {
            error!(
                native_in,
                token_in, native_out, token_out, "swap rejected: constant product would shrink"
            );
            return Err(AmmError::InvariantViolation);
        }

        let (amount_in, amount_out, direction) = if native_in > 0 {
            (native_in, token_out, SwapDirection::NativeToToken)
        } else {
            (token_in, native_out, SwapDirection::TokenToNative)
        };
        state.reserve_native = new_reserve_native;
        state.reserve_token = new_reserve_token;
        state.events.push(PoolEvent::Swapped {
            trader,
            amount_in,
            amount_out,
            direction,
        });
        debug!(amount_in, amount_out, ?direction, "swap committed");
        Ok(())
    }

    fn ensure_router(&self, caller: Address) -> Result<(), AmmError> {
        if caller != self.router {
            return Err(AmmError::Unauthorized);
        }
        Ok(())
    }

    fn move_shares_into(
        state: &mut PairState,
        to: Address,
        amount: u128,
    ) -> Result<(), AmmError> {
        let credited = state
            .share_balances
            .get(&to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(AmmError::ArithmeticOverflow)?;
        state.share_balances.insert(to, credited);
        Ok(())
    }
}
