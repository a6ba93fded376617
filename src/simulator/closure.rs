//! Bridge between a [`CompiledModel`] and diffsol's equation traits.

use diffsol::{
    ConstantOp, LinearOp, NonLinearOp, NonLinearOpJacobian, OdeEquations, OdeEquationsRef, Op,
};
use nalgebra::DVector;
use std::cell::RefCell;

use crate::model::compile::CompiledModel;

type T = f64;
type V = nalgebra::DVector<f64>;
type M = nalgebra::DMatrix<f64>;

pub struct ModelRhs<'a> {
    model: &'a CompiledModel,
    env: &'a RefCell<Vec<f64>>,
}

impl<'a> Op for ModelRhs<'a> {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.model.nstates()
    }
    fn nout(&self) -> usize {
        self.model.nstates()
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl<'a> NonLinearOp for ModelRhs<'a> {
    fn call_inplace(&self, x: &Self::V, t: Self::T, y: &mut Self::V) {
        let mut env = self.env.borrow_mut();
        self.model.rhs(x, t, y, &mut env);
    }
}

impl<'a> NonLinearOpJacobian for ModelRhs<'a> {
    fn jac_mul_inplace(&self, x: &Self::V, t: Self::T, v: &Self::V, y: &mut Self::V) {
        // directional finite difference: (f(x + h v) - f(x)) / h
        let h = 1e-8 * (1.0 + x.norm());
        let mut env = self.env.borrow_mut();
        let xp = x + v * h;
        let mut fp = DVector::zeros(x.len());
        self.model.rhs(&xp, t, &mut fp, &mut env);
        self.model.rhs(x, t, y, &mut env);
        y.axpy(1.0 / h, &fp, -1.0 / h);
    }
}

pub struct ModelMass;

impl Op for ModelMass {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        0
    }
    fn nout(&self) -> usize {
        0
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl LinearOp for ModelMass {
    fn gemv_inplace(&self, _x: &Self::V, _t: Self::T, _beta: Self::T, _y: &mut Self::V) {}
}

pub struct ModelInit {
    nstates: usize,
    init: V,
}

impl Op for ModelInit {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.nstates
    }
    fn nout(&self) -> usize {
        self.nstates
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl ConstantOp for ModelInit {
    fn call_inplace(&self, _t: Self::T, y: &mut Self::V) {
        y.copy_from(&self.init);
    }
}

pub struct ModelRoot;

impl Op for ModelRoot {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        0
    }
    fn nout(&self) -> usize {
        0
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl NonLinearOp for ModelRoot {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

pub struct ModelOut;

impl Op for ModelOut {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        0
    }
    fn nout(&self) -> usize {
        0
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl NonLinearOp for ModelOut {
    fn call_inplace(&self, _x: &Self::V, _t: Self::T, _y: &mut Self::V) {}
}

/// ODE problem for one timecourse segment.
pub struct SegmentProblem {
    model: CompiledModel,
    init: V,
    env: RefCell<Vec<f64>>,
}

impl SegmentProblem {
    pub fn new(model: CompiledModel, init: V) -> Self {
        let env = RefCell::new(vec![0.0; model.env_len()]);
        Self { model, init, env }
    }
}

impl Op for SegmentProblem {
    type T = T;
    type V = V;
    type M = M;
    fn nstates(&self) -> usize {
        self.model.nstates()
    }
    fn nout(&self) -> usize {
        self.model.nstates()
    }
    fn nparams(&self) -> usize {
        0
    }
}

impl<'b> OdeEquationsRef<'b> for SegmentProblem {
    type Rhs = ModelRhs<'b>;
    type Mass = ModelMass;
    type Init = ModelInit;
    type Root = ModelRoot;
    type Out = ModelOut;
}

impl OdeEquations for SegmentProblem {
    fn rhs(&self) -> ModelRhs<'_> {
        ModelRhs {
            model: &self.model,
            env: &self.env,
        }
    }

    fn mass(&self) -> Option<ModelMass> {
        None
    }

    fn init(&self) -> ModelInit {
        ModelInit {
            nstates: self.model.nstates(),
            init: self.init.clone(),
        }
    }

    fn root(&self) -> Option<ModelRoot> {
        None
    }

    fn out(&self) -> Option<ModelOut> {
        None
    }

    fn get_params(&self, _p: &mut V) {}

    fn set_params(&mut self, _p: &V) {}
}
