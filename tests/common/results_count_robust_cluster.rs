//! Reference results for count models on the ship accident data.
//!
//! Model: `accident ~ yr_con + op_75_79` with the constant last, 34 complete
//! rows, 5 ship clusters. Values follow the conventions of the package that
//! produced them:
//!
//! - cluster bse carry the factor `G/(G-1)` only
//! - robust (HC) bse carry the factor `n/(n-1)`
//! - NB rows list `lnalpha` second to last and `alpha` last

/// One set of reference estimates.
#[derive(Debug, Clone, Copy)]
pub struct CountResults {
    pub params: &'static [f64],
    pub bse: &'static [f64],
    pub ll: f64,
    pub ll_0: f64,
}

/// Poisson, cluster-robust by ship.
pub const POISSON_CLU: CountResults = CountResults {
    params: &[-0.02172061893579119, 0.22148585072183596, 2.2697077143201403],
    bse: &[0.19933709357098192, 0.11093628220779031, 1.104856990156163],
    ll: -354.24364130255583,
    ll_0: -356.2029100704884,
};

/// Poisson, heteroskedasticity-robust.
pub const POISSON_HC1: CountResults = CountResults {
    params: &[-0.02172061893579119, 0.22148585072183596, 2.2697077143201403],
    bse: &[0.1923371324814449, 0.5530140477211489, 0.6653252336847496],
    ll: -354.24364130255583,
    ll_0: -356.2029100704884,
};

/// Poisson with exposure `service`, cluster-robust by ship.
pub const POISSON_EXPOSURE_CLU: CountResults = CountResults {
    params: &[0.3063381945044961, 0.35592229608497516, -6.97471280277242],
    bse: &[0.038176942959091645, 0.09213163536669068, 0.09686566266005908],
    ll: -91.2872794008157,
    ll_0: -122.09741392804152,
};

/// NB2, cluster-robust by ship.
pub const NEGBIN_CLU: CountResults = CountResults {
    params: &[
        -0.035367072015908045,
        0.23211569301327545,
        2.2952623716364604,
        0.8459963005507525,
        2.330298335925434,
    ],
    bse: &[
        0.272160902102648,
        0.099724562844055,
        1.2335785523785803,
        0.22483100080972393,
        0.5239233070513496,
    ],
    ll: -109.0877965183259,
    ll_0: -109.16847206043113,
};

/// NB2 with exposure `service`, cluster-robust by ship.
pub const NEGBIN_EXPOSURE_CLU: CountResults = CountResults {
    params: &[
        0.2850376254677844,
        0.17127003521640013,
        -6.590863903359747,
        -1.403472226233445,
        0.2457422083055615,
    ],
    bse: &[
        0.14270989694961106,
        0.17997186813620297,
        0.6254274699771931,
        0.8657940377437381,
        0.21276213877293487,
    ],
    ll: -82.49115612464298,
    ll_0: -84.68893065247893,
};

/// Model-based standard errors of the Poisson fit without exposure.
pub const POISSON_NONROBUST_BSE: [f64; 3] =
    [0.05333642276055983, 0.11277775821117253, 0.1356804183772937];

/// Model-based standard errors of the Poisson fit with exposure.
pub const POISSON_EXPOSURE_NONROBUST_BSE: [f64; 3] =
    [0.05790831365493146, 0.12151759298720213, 0.13252425018257305];
