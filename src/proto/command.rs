/// Measurement sources addressed by the `QM` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    AMain,
    ASub,
    BMain,
    BSub,
}

impl Source {
    /// Argument for the `QM` mnemonic.
    pub fn query_code(self) -> &'static str {
        match self {
            Self::AMain => "11",
            Self::ASub => "12",
            Self::BMain => "21",
            Self::BSub => "22",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AMain => "A",
            Self::ASub => "A sub",
            Self::BMain => "B",
            Self::BSub => "B sub",
        }
    }
}

/// Which readings to query per polling cycle, selected on the command line
/// as 1 = A main, 2 = A main+sub, 3 = A+B main, 4 = A+B main+sub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelSelection {
    AMain,
    AMainAndSub,
    BothMain,
    All,
}

impl ChannelSelection {
    pub fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            1 => Some(Self::AMain),
            2 => Some(Self::AMainAndSub),
            3 => Some(Self::BothMain),
            4 => Some(Self::All),
            _ => None,
        }
    }

    /// Sources queried on each cycle, in wire order.
    pub fn sources(self) -> &'static [Source] {
        match self {
            Self::AMain => &[Source::AMain],
            Self::AMainAndSub => &[Source::AMain, Source::ASub],
            Self::BothMain => &[Source::AMain, Source::BMain],
            Self::All => &[Source::AMain, Source::ASub, Source::BMain, Source::BSub],
        }
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    /// `QM` - query one measurement reading
    QueryMeasurement(Source),
    /// `PC` - switch the device baudrate
    SetBaudRate(u32),
    /// `QP 0,3` - dump the screen contents
    RequestScreendump,
}
