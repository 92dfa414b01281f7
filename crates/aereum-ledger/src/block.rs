//! Block building: accumulate validated instructions and their overlay,
//! then commit the overlay at the epoch boundary.

use aereum_instructions::{Instruction, InstructionValidator};
use aereum_state::{Mutation, State};
use tracing::{debug, info};

use crate::error::BlockError;
use crate::validator::MutatingState;

/// A sealed block: the accepted instructions and the overlay they produced.
#[derive(Debug)]
pub struct Block {
    pub epoch: u64,
    pub instructions: Vec<Instruction>,
    pub mutations: Mutation,
    pub fee_collected: u64,
}

/// Builds one block against a snapshot of committed state.
///
/// Instructions are validated sequentially; each sees the effects of the
/// accepted instructions before it through the overlay. A rejected
/// instruction leaves no trace, and dropping the builder discards the
/// whole overlay atomically.
pub struct BlockBuilder<'a> {
    validator: MutatingState<'a>,
    instructions: Vec<Instruction>,
}

impl<'a> BlockBuilder<'a> {
    pub fn new(state: &'a State) -> Self {
        Self {
            validator: MutatingState::new(state),
            instructions: Vec::new(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.validator.epoch()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn fee_collected(&self) -> u64 {
        self.validator.fee_collected()
    }

    /// Parse and validate a raw instruction byte string.
    pub async fn push_bytes(&mut self, data: &[u8]) -> Result<(), BlockError> {
        let instruction = Instruction::parse(data)?;
        self.push(instruction).await
    }

    /// Validate a parsed instruction and, on success, include it.
    pub async fn push(&mut self, instruction: Instruction) -> Result<(), BlockError> {
        let snapshot = self.validator.snapshot();
        match instruction.validate(&mut self.validator).await {
            Ok(()) => {
                self.instructions.push(instruction);
                Ok(())
            }
            Err(reason) => {
                self.validator.restore(snapshot);
                debug!(kind = ?instruction.kind(), %reason, "instruction rejected");
                Err(BlockError::Validation(reason))
            }
        }
    }

    /// Seal the block, releasing the borrow on committed state. Apply it
    /// with [`State::advance_epoch`].
    pub fn seal(self) -> Block {
        let epoch = self.validator.epoch();
        let (mutations, fee_collected) = self.validator.into_parts();
        info!(
            epoch,
            instructions = self.instructions.len(),
            fee_collected,
            "block sealed"
        );
        Block {
            epoch,
            instructions: self.instructions,
            mutations,
            fee_collected,
        }
    }
}
