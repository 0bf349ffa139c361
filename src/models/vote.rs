#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    Created,
    Updated,
}

impl VoteOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            VoteOutcome::Created => "Vote submitted successfully!",
            VoteOutcome::Updated => "Vote updated successfully!",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_outcome_messages() {
        assert_eq!(VoteOutcome::Created.message(), "Vote submitted successfully!");
        assert_eq!(VoteOutcome::Updated.message(), "Vote updated successfully!");
    }
}
