//! A deterministic stand-in for a virtual machine.

use rialto::{
    executor::vm::{BlockContext, Repository, Vm, VmOutcome},
    types::transaction::{Transaction, TransactionType},
};

/// Charges a fixed amount of gas per call. Code that starts with `0xff` fails. Any other code
/// succeeds: a `CALL` stores its input under the key `b"input"` of the called contract, and a
/// `CREATE` returns its init code as the contract's code.
#[derive(Clone)]
pub(crate) struct FakeVm {
    pub(crate) gas_per_call: u64,
}

impl FakeVm {
    pub(crate) fn new() -> FakeVm {
        FakeVm { gas_per_call: 21_000 }
    }
}

impl Vm for FakeVm {
    fn call(
        &mut self,
        repository: &mut dyn Repository,
        _context: &BlockContext,
        transaction: &Transaction,
        code: &[u8],
    ) -> VmOutcome {
        if code.first() == Some(&0xff) {
            return VmOutcome {
                success: false,
                gas_used: self.gas_per_call,
                return_data: Vec::new(),
                logs: Vec::new(),
            };
        }

        if transaction.tx_type == TransactionType::Call {
            repository.put_storage(&transaction.to, b"input", transaction.data.clone());
        }
        VmOutcome {
            success: true,
            gas_used: self.gas_per_call,
            return_data: code.to_vec(),
            logs: Vec::new(),
        }
    }
}
