use std::{cmp::Ordering, collections::VecDeque};

use uuid::Uuid;

use crate::{
    process::RegistryProcessBuilder,
    saga::{SagaError, precondition},
    wallet::WalletSlice,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSummary {
    pub claimed_quantity: u64,
    pub allocation_ids: Vec<Uuid>,
    pub splits: usize,
}

/// Greedy pairing of reserved production and consumption slices.
///
/// Walks consumption slices once, splitting whichever side of a pair is
/// larger so every claim gets equal quantities. Everything not needed for
/// `quantity` is released back to `Available`.
pub struct ClaimMatcher<'b, 'a> {
    builder: &'b mut RegistryProcessBuilder<'a>,
    summary: MatchSummary,
}

impl<'b, 'a> ClaimMatcher<'b, 'a> {
    pub fn reconcile(
        builder: &'b mut RegistryProcessBuilder<'a>,
        production: Vec<WalletSlice>,
        consumption: Vec<WalletSlice>,
        quantity: u64,
    ) -> Result<MatchSummary, SagaError> {
        let mut matcher = Self {
            builder,
            summary: MatchSummary {
                claimed_quantity: 0,
                allocation_ids: Vec::new(),
                splits: 0,
            },
        };
        matcher.run(production.into(), consumption, quantity)?;
        Ok(matcher.summary)
    }

    fn run(
        &mut self,
        mut production: VecDeque<WalletSlice>,
        consumption: Vec<WalletSlice>,
        quantity: u64,
    ) -> Result<(), SagaError> {
        let mut remainder_to_claim = quantity;
        let mut production_remainder: Option<WalletSlice> = None;

        for consumption_slice in consumption {
            let mut consumption_remainder = Some(consumption_slice);
            while let Some(mut current_consumption) = consumption_remainder.take() {
                if remainder_to_claim == 0 {
                    self.builder.release_slice(&current_consumption)?;
                    break;
                }

                if current_consumption.quantity > remainder_to_claim {
                    let (needed, excess) = self.split(&current_consumption, remainder_to_claim)?;
                    self.builder.release_slice(&excess)?;
                    current_consumption = needed;
                }

                let current_production = match production_remainder.take() {
                    Some(slice) => slice,
                    None => production.pop_front().ok_or_else(|| {
                        precondition(format!(
                            "reserved production does not cover the claim: {remainder_to_claim} left"
                        ))
                    })?,
                };

                let matched = match current_production
                    .quantity
                    .cmp(&current_consumption.quantity)
                {
                    Ordering::Equal => {
                        self.claim(&current_production, &current_consumption)?;
                        current_consumption.quantity
                    }
                    Ordering::Greater => {
                        let (part, leftover) =
                            self.split(&current_production, current_consumption.quantity)?;
                        self.claim(&part, &current_consumption)?;
                        production_remainder = Some(leftover);
                        current_consumption.quantity
                    }
                    Ordering::Less => {
                        let (part, leftover) =
                            self.split(&current_consumption, current_production.quantity)?;
                        self.claim(&current_production, &part)?;
                        consumption_remainder = Some(leftover);
                        current_production.quantity
                    }
                };
                remainder_to_claim -= matched;
            }
        }

        if remainder_to_claim > 0 {
            return Err(precondition(format!(
                "reserved consumption does not cover the claim: {remainder_to_claim} left"
            )));
        }

        for unused in production_remainder.into_iter().chain(production) {
            self.builder.release_slice(&unused)?;
        }
        Ok(())
    }

    fn split(
        &mut self,
        slice: &WalletSlice,
        quantity: u64,
    ) -> Result<(WalletSlice, WalletSlice), SagaError> {
        let parts = self.builder.split_slice(slice, quantity)?;
        self.summary.splits += 1;
        Ok(parts)
    }

    fn claim(&mut self, production: &WalletSlice, consumption: &WalletSlice) -> Result<(), SagaError> {
        let allocation_id = self.builder.claim(production, consumption)?;
        self.summary.claimed_quantity += production.quantity;
        self.summary.allocation_ids.push(allocation_id);
        Ok(())
    }
}
